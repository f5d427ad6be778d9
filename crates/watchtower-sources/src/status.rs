//! Gateway status adapter

use crate::base::{command_ref, SourceAdapter};
use crate::probe::{run_template, CommandRunner};
use async_trait::async_trait;
use std::sync::Arc;
use watchtower_core::classify::classify_health;
use watchtower_core::{
    CollectedSnapshot, HealthStatus, SourceMetadata, SourceType, StatusSnapshot, Transport,
};

pub struct StatusAdapter {
    runner: Arc<dyn CommandRunner>,
    command: Vec<String>,
}

impl StatusAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>, command: Vec<String>) -> Self {
        Self { runner, command }
    }
}

#[async_trait]
impl SourceAdapter for StatusAdapter {
    type Data = StatusSnapshot;

    fn source_type(&self) -> SourceType {
        SourceType::Status
    }

    async fn collect(&self) -> CollectedSnapshot<StatusSnapshot> {
        let metadata = SourceMetadata::new(SourceType::Status, Transport::Command, command_ref(&self.command));
        let output = run_template(self.runner.as_ref(), &self.command).await;

        if !output.success() {
            let error = output.failure_text().to_string();
            return CollectedSnapshot {
                metadata,
                data: StatusSnapshot {
                    status: HealthStatus::Unknown,
                    raw: output.stdout.clone(),
                    errors: vec![error.clone()],
                },
                warnings: vec![format!("status_command_failed:{error}")],
            };
        }

        CollectedSnapshot {
            metadata,
            data: StatusSnapshot {
                status: classify_health(&output.stdout),
                raw: output.stdout,
                errors: Vec::new(),
            },
            warnings: Vec::new(),
        }
    }
}
