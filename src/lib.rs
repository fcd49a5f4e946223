pub mod api;
pub mod core;

pub use crate::api::video::VideoVerdictService;
pub use crate::core::error::AnalysisError;

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("frame_verdict"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // logging handled by android_logger on Android
        // other hosts install their own `log` backend
    }
}
