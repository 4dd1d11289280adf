//! Infrastructure layer - Estimators, files, training and process services

pub mod artifact;
pub mod estimator;
pub mod logging;
pub mod services;
pub mod session;
pub mod synthetic;
pub mod tabular;
pub mod training;
