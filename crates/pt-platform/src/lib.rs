pub mod app_dirs;
pub mod clipboard;
pub mod surface;

pub use app_dirs::DirsAppDirsAdapter;
pub use clipboard::ArboardClipboard;
pub use surface::FileSurfaceRegistry;
