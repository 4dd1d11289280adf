//! Offline model fitting - dataset preparation, fitting and hold-out evaluation

mod dataset;
mod metrics;

pub use dataset::{combine, encode_target, prepare, NamedTable, PreparedDataset};
pub use metrics::{accuracy, class_metrics, roc_auc, stratified_split};

use chrono::Utc;
use ndarray::{Array2, Axis};
use tracing::info;

use crate::domain::{
    Algorithm, ArtifactMetadata, Classifier, ConfusionMatrix, DomainError, EstimatorError,
    FeatureSchema, FeatureWeight, ModelMetrics, TrainingOptions, TrainingReport,
};
use crate::infrastructure::artifact::ArtifactBundle;
use crate::infrastructure::estimator::{
    Estimator, ForestParams, LinearSvm, LogisticParams, LogisticRegression, NearestCentroid,
    Pipeline, RandomForest, StandardScaler, SvmParams,
};

/// A fitted artifact ready to be written, plus its evaluation
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub bundle: ArtifactBundle,
    pub report: TrainingReport,
}

/// Fits a model on the canonical clinical features
#[derive(Debug, Clone)]
pub struct Trainer {
    features: FeatureSchema,
}

impl Default for Trainer {
    fn default() -> Self {
        Self {
            features: FeatureSchema::canonical(),
        }
    }
}

impl Trainer {
    pub fn with_features(features: FeatureSchema) -> Self {
        Self { features }
    }

    pub fn train(
        &self,
        files: &[NamedTable],
        options: &TrainingOptions,
    ) -> Result<TrainedModel, DomainError> {
        options.validate()?;

        let combined = combine(files, &self.features, &options.target)?;
        let data = prepare(&combined, &self.features)?;

        let (train_idx, test_idx) = stratified_split(&data.y, options.test_size, options.random_state);
        if test_idx.is_empty() || train_idx.is_empty() {
            return Err(DomainError::training(format!(
                "{} usable rows are too few for a train/test split",
                data.y.len()
            )));
        }

        let x_train = data.x.select(Axis(0), &train_idx);
        let y_train: Vec<u8> = train_idx.iter().map(|&i| data.y[i]).collect();
        let x_test = data.x.select(Axis(0), &test_idx);
        let y_test: Vec<u8> = test_idx.iter().map(|&i| data.y[i]).collect();

        let preprocessor = if options.scale_features {
            Some(StandardScaler::fit(x_train.view()).map_err(fit_error)?)
        } else {
            None
        };
        let fit_input = match &preprocessor {
            Some(scaler) => scaler.transform(x_train.view()).map_err(fit_error)?,
            None => x_train,
        };

        let estimator = fit_estimator(&fit_input, &y_train, options).map_err(fit_error)?;
        let model = Estimator::Pipeline(Pipeline {
            feature_names_in: Some(self.features.names().to_vec()),
            preprocessor,
            estimator: Box::new(estimator),
        });

        let report = self.evaluate(&model, &x_test, &y_test, &data, options, train_idx.len())?;

        info!(
            algorithm = %options.algorithm,
            rows = data.y.len(),
            accuracy = report.accuracy,
            roc_auc = ?report.roc_auc,
            "Training completed"
        );

        let metadata = ArtifactMetadata {
            features: Some(self.features.clone()),
            metrics: Some(ModelMetrics {
                accuracy: report.accuracy,
                roc_auc: report.roc_auc,
            }),
            target_mapping: data.target_mapping.clone(),
            algorithm: Some(options.algorithm.to_string()),
            trained_at: Some(Utc::now()),
        };

        Ok(TrainedModel {
            bundle: ArtifactBundle {
                estimator: model,
                metadata,
            },
            report,
        })
    }

    fn evaluate(
        &self,
        model: &Estimator,
        x_test: &Array2<f64>,
        y_test: &[u8],
        data: &PreparedDataset,
        options: &TrainingOptions,
        train_rows: usize,
    ) -> Result<TrainingReport, DomainError> {
        let predicted = model.predict(x_test.view()).map_err(fit_error)?.to_vec();
        let confusion_matrix = ConfusionMatrix::from_labels(y_test, &predicted);

        let scores = model
            .predict_proba(x_test.view())
            .or_else(|_| model.decision_function(x_test.view()))
            .ok();
        let roc_auc = scores.and_then(|s| roc_auc(y_test, &s.to_vec()));

        let feature_weights = model
            .feature_weights()
            .map(|weights| {
                self.features
                    .names()
                    .iter()
                    .zip(weights)
                    .map(|(feature, value)| FeatureWeight {
                        feature: feature.clone(),
                        value,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(TrainingReport {
            algorithm: options.algorithm,
            target: options.target.clone(),
            features: self.features.names().to_vec(),
            rows_used: data.y.len(),
            rows_dropped: data.rows_dropped,
            train_rows,
            test_rows: y_test.len(),
            accuracy: accuracy(&confusion_matrix),
            roc_auc,
            confusion_matrix,
            classes: class_metrics(&confusion_matrix),
            feature_weights,
            target_mapping: data.target_mapping.clone(),
            artifact_path: None,
        })
    }
}

fn fit_estimator(
    x: &Array2<f64>,
    y: &[u8],
    options: &TrainingOptions,
) -> Result<Estimator, EstimatorError> {
    let x = x.view();
    Ok(match options.algorithm {
        Algorithm::LogisticRegression => {
            let params = LogisticParams {
                class_weight_balanced: options.class_weight_balanced,
                ..Default::default()
            };
            Estimator::LogisticRegression(LogisticRegression::fit(x, y, &params)?)
        }
        Algorithm::RandomForest => {
            let params = ForestParams {
                n_estimators: options.n_estimators,
                max_depth: options.max_depth,
                random_state: options.random_state,
                class_weight_balanced: options.class_weight_balanced,
                ..Default::default()
            };
            Estimator::RandomForest(RandomForest::fit(x, y, &params)?)
        }
        Algorithm::LinearSvm => {
            let params = SvmParams {
                class_weight_balanced: options.class_weight_balanced,
                ..Default::default()
            };
            Estimator::LinearSvm(LinearSvm::fit(x, y, &params)?)
        }
        Algorithm::NearestCentroid => Estimator::NearestCentroid(NearestCentroid::fit(x, y)?),
    })
}

fn fit_error(error: EstimatorError) -> DomainError {
    DomainError::training(error.to_string())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::domain::{DataTable, CANONICAL_FEATURES};

    /// Canonical-feature table whose `output` depends on `thalachh` and `oldpeak`
    pub fn training_table(rows: usize, seed: u64) -> DataTable {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut headers: Vec<String> = CANONICAL_FEATURES.iter().map(|s| s.to_string()).collect();
        headers.push("output".into());

        let data = (0..rows)
            .map(|i| {
                let positive = i % 2 == 0;
                let thalachh: f64 = if positive {
                    rng.gen_range(160.0..200.0)
                } else {
                    rng.gen_range(100.0..140.0)
                };
                let oldpeak: f64 = if positive {
                    rng.gen_range(0.0..1.0)
                } else {
                    rng.gen_range(2.0..4.0)
                };
                let values = [
                    rng.gen_range(30..75) as f64,
                    rng.gen_range(0..2) as f64,
                    rng.gen_range(0..4) as f64,
                    rng.gen_range(100..180) as f64,
                    rng.gen_range(150..350) as f64,
                    rng.gen_range(0..2) as f64,
                    rng.gen_range(0..2) as f64,
                    thalachh.round(),
                    rng.gen_range(0..2) as f64,
                    (oldpeak * 10.0).round() / 10.0,
                    rng.gen_range(0..3) as f64,
                    rng.gen_range(0..4) as f64,
                    rng.gen_range(0..4) as f64,
                    f64::from(u8::from(positive)),
                ];
                values.iter().map(|v| v.to_string()).collect()
            })
            .collect();

        DataTable::with_rows(headers, data)
    }
}
