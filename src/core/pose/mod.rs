pub mod archive;
pub mod config;
pub mod error;
pub mod item;
pub mod landmark;
pub mod normalize;
pub mod pose_set;
pub mod queue;
pub mod similarity;
pub mod vector;

pub use archive::{PoseSetJson, PoseSetJsonItem, GENERATOR, VERSION};
pub use config::PoseSetConfig;
pub use error::PoseSetError;
pub use item::{DuplicatedItem, PoseDebug, PoseImages, PoseSetItem, VideoMetadata};
pub use landmark::{Landmark, LandmarkResult};
pub use pose_set::{PoseSet, SimilarPoseItem, SimilarPoseTarget};
pub use queue::SimilarPoseQueue;
pub use vector::{BodyVector, HandSide, HandVector};
