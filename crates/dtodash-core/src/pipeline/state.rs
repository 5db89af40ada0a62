//! Pure pipeline stage transitions.
//!
//! Every transition takes the current [`PipelineStatus`] and returns the next
//! one. A transition that would break stage ordering (a later stage moving
//! while an earlier one is still idle) leaves the status unchanged.

/// Progress of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageStatus {
    #[default]
    Idle,
    Running,
    Ready,
}

impl StageStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::Ready => "Ready",
        }
    }
}

/// The three coarse stages the dashboard reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Upload,
    Extraction,
    Persistence,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Upload, Stage::Extraction, Stage::Persistence];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Upload => "Upload to blob storage",
            Self::Extraction => "DTO extraction + OCR",
            Self::Persistence => "AI analysis + persistence",
        }
    }

    pub fn detail(&self) -> &'static str {
        match self {
            Self::Upload => "Direct SAS upload with validation",
            Self::Extraction => "Files routed to extraction workers",
            Self::Persistence => "Insights streamed to the catalog",
        }
    }
}

/// Result of looking for the uploaded file in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceCheck {
    /// The record is in the catalog.
    Found,
    /// Not there yet; `retry_pending` is true while a re-check is still scheduled.
    Missing { retry_pending: bool },
    /// The lookup itself failed.
    LookupFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStatus {
    pub upload: StageStatus,
    pub extraction: StageStatus,
    pub persistence: StageStatus,
}

impl PipelineStatus {
    pub const IDLE: PipelineStatus = PipelineStatus {
        upload: StageStatus::Idle,
        extraction: StageStatus::Idle,
        persistence: StageStatus::Idle,
    };

    pub fn stage(&self, stage: Stage) -> StageStatus {
        match stage {
            Stage::Upload => self.upload,
            Stage::Extraction => self.extraction,
            Stage::Persistence => self.persistence,
        }
    }

    pub fn start_upload(self) -> Self {
        Self {
            upload: StageStatus::Running,
            ..Self::IDLE
        }
    }

    pub fn upload_succeeded(self) -> Self {
        Self {
            upload: StageStatus::Ready,
            ..Self::IDLE
        }
    }

    pub fn extraction_started(self) -> Self {
        if self.upload != StageStatus::Ready {
            return self;
        }
        Self {
            extraction: StageStatus::Running,
            ..self
        }
    }

    pub fn extraction_elapsed(self) -> Self {
        if self.extraction == StageStatus::Idle {
            return self;
        }
        Self {
            extraction: StageStatus::Ready,
            persistence: StageStatus::Running,
            ..self
        }
    }

    pub fn persistence_check_resolved(self, check: PersistenceCheck) -> Self {
        if self.persistence == StageStatus::Idle {
            return self;
        }
        let persistence = match check {
            PersistenceCheck::Missing { retry_pending: true } => StageStatus::Running,
            PersistenceCheck::Found
            | PersistenceCheck::Missing { retry_pending: false }
            | PersistenceCheck::LookupFailed => StageStatus::Ready,
        };
        Self {
            persistence,
            ..self
        }
    }

    pub fn clear(self) -> Self {
        Self::IDLE
    }

    /// Later stages only move once earlier stages have.
    pub fn is_ordered(&self) -> bool {
        let extraction_ok =
            self.extraction == StageStatus::Idle || self.upload != StageStatus::Idle;
        let persistence_ok =
            self.persistence == StageStatus::Idle || self.extraction != StageStatus::Idle;
        extraction_ok && persistence_ok
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::IDLE
    }

    pub fn is_complete(&self) -> bool {
        Stage::ALL
            .iter()
            .all(|&s| self.stage(s) == StageStatus::Ready)
    }

    pub fn is_running(&self) -> bool {
        Stage::ALL
            .iter()
            .any(|&s| self.stage(s) == StageStatus::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StageStatus::*;

    fn status(
        upload: StageStatus,
        extraction: StageStatus,
        persistence: StageStatus,
    ) -> PipelineStatus {
        PipelineStatus {
            upload,
            extraction,
            persistence,
        }
    }

    #[test]
    fn start_upload_resets_later_stages() {
        let s = status(Ready, Ready, Running).start_upload();
        assert_eq!(s, status(Running, Idle, Idle));
    }

    #[test]
    fn full_happy_path() {
        let s = PipelineStatus::IDLE
            .start_upload()
            .upload_succeeded()
            .extraction_started();
        assert_eq!(s, status(Ready, Running, Idle));
        let s = s.extraction_elapsed();
        assert_eq!(s, status(Ready, Ready, Running));
        let s = s.persistence_check_resolved(PersistenceCheck::Found);
        assert!(s.is_complete());
    }

    #[test]
    fn missing_with_retry_stays_running() {
        let s = status(Ready, Ready, Running)
            .persistence_check_resolved(PersistenceCheck::Missing { retry_pending: true });
        assert_eq!(s.persistence, Running);
        let s = s.persistence_check_resolved(PersistenceCheck::Missing { retry_pending: false });
        assert_eq!(s.persistence, Ready);
    }

    #[test]
    fn lookup_failure_fails_open() {
        let s = status(Ready, Ready, Running)
            .persistence_check_resolved(PersistenceCheck::LookupFailed);
        assert_eq!(s.persistence, Ready);
    }

    #[test]
    fn out_of_order_transitions_are_ignored() {
        assert_eq!(PipelineStatus::IDLE.extraction_started(), PipelineStatus::IDLE);
        assert_eq!(PipelineStatus::IDLE.extraction_elapsed(), PipelineStatus::IDLE);
        assert_eq!(
            PipelineStatus::IDLE.persistence_check_resolved(PersistenceCheck::Found),
            PipelineStatus::IDLE
        );
        let uploading = PipelineStatus::IDLE.start_upload();
        assert_eq!(uploading.extraction_started(), uploading);
    }

    #[test]
    fn ordering_invariant() {
        assert!(PipelineStatus::IDLE.is_ordered());
        assert!(status(Ready, Running, Idle).is_ordered());
        assert!(!status(Idle, Running, Idle).is_ordered());
        assert!(!status(Ready, Idle, Ready).is_ordered());
    }

    #[test]
    fn clear_returns_to_idle() {
        assert!(status(Ready, Ready, Running).clear().is_idle());
    }
}
