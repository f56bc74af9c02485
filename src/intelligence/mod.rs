pub mod features;
pub mod kmeans;
pub mod pca;
pub mod scaler;
pub mod summary;

pub use features::{account_features, engineer_features};
pub use kmeans::{ClusterAssigner, ClusterModel, KMeansParams};
pub use pca::ProjectionModel;
pub use scaler::{feature_matrix, Standardizer};
pub use summary::summarize_clusters;
