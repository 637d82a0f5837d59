pub mod api;
pub mod core;

pub use api::pose_extractor::{ExtractionStats, PoseExtractor};

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("pose_extractor"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // RUST_LOG 控制级别；重复初始化时忽略
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();
    }
}
