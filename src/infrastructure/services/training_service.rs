//! Training service - fit off the async runtime, then persist the artifact

use std::sync::Arc;

use tracing::info;

use crate::domain::{DomainError, TrainingOptions, TrainingReport};
use crate::infrastructure::artifact::FileArtifactRepository;
use crate::infrastructure::training::{NamedTable, Trainer};

/// Trains and saves a model; never activates it
#[derive(Debug, Clone)]
pub struct TrainingService {
    trainer: Trainer,
    repository: Arc<FileArtifactRepository>,
}

impl TrainingService {
    pub fn new(repository: Arc<FileArtifactRepository>) -> Self {
        Self {
            trainer: Trainer::default(),
            repository,
        }
    }

    /// Fit on the given files and write the artifact atomically
    ///
    /// Nothing is written when any step fails.
    pub async fn train(
        &self,
        files: Vec<NamedTable>,
        options: TrainingOptions,
    ) -> Result<TrainingReport, DomainError> {
        let trainer = self.trainer.clone();
        let file_count = files.len();

        let trained = tokio::task::spawn_blocking(move || trainer.train(&files, &options))
            .await
            .map_err(|e| DomainError::internal(format!("training task failed: {}", e)))??;

        let path = self.repository.save(&trained.bundle).await?;

        let mut report = trained.report;
        report.artifact_path = Some(path.display().to_string());

        info!(
            files = file_count,
            path = %path.display(),
            "Model trained and saved, activate it to start using it"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Algorithm, ArtifactSource, DataTable};
    use crate::infrastructure::training::fixtures::training_table;

    #[tokio::test]
    async fn test_train_writes_loadable_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(FileArtifactRepository::at(dir.path().join("heart_model.json")));
        let service = TrainingService::new(Arc::clone(&repository));

        let report = service
            .train(
                vec![NamedTable::new("heart.csv", training_table(60, 9))],
                TrainingOptions {
                    algorithm: Algorithm::RandomForest,
                    n_estimators: 5,
                    max_depth: 3,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(report.artifact_path.unwrap().ends_with("heart_model.json"));

        let artifact = repository.load().await.unwrap();
        assert_eq!(artifact.classifier().name(), "random_forest");
        assert!(artifact.capabilities().probability);
        assert!(artifact.metadata().metrics.is_some());
    }

    #[tokio::test]
    async fn test_text_target_mapping_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let repository = Arc::new(FileArtifactRepository::at(dir.path().join("heart_model.json")));
        let service = TrainingService::new(Arc::clone(&repository));

        let mut table = training_table(60, 9);
        let output = table.column_index("output").unwrap();
        let labels = (0..table.n_rows())
            .map(|row| match table.cell(row, output) {
                Some("1") => "yes".to_string(),
                _ => "no".to_string(),
            })
            .collect();
        table.set_column("output", labels);

        service
            .train(vec![NamedTable::new("heart.csv", table)], TrainingOptions::default())
            .await
            .unwrap();

        let artifact = repository.load().await.unwrap();
        assert_eq!(artifact.label_name(0), Some("no"));
        assert_eq!(artifact.label_name(1), Some("yes"));
    }

    #[tokio::test]
    async fn test_failed_training_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heart_model.json");
        let service = TrainingService::new(Arc::new(FileArtifactRepository::at(&path)));

        let table = DataTable::with_rows(vec!["age".into()], vec![vec!["50".into()]]);
        let result = service
            .train(vec![NamedTable::new("bad.csv", table)], TrainingOptions::default())
            .await;

        assert!(matches!(result, Err(DomainError::SchemaMismatch { .. })));
        assert!(!path.exists());
    }
}
