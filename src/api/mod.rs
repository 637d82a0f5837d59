pub mod pose_extractor;
