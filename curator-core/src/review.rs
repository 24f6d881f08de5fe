use tracing::info;

use crate::error::Result;
use crate::metadata::BatchMetadata;
use crate::workspace::{BatchRef, Workspace};

/// Mark `party` (1-based) as having reviewed `batch`.
///
/// An out-of-range party fails validation before anything is written, so the
/// metadata file is left untouched.
pub fn update_review_status(workspace: &Workspace, batch: &BatchRef, party: usize) -> Result<BatchMetadata> {
    let mut metadata = workspace.read_batch_metadata(batch)?;
    metadata.is_reviewed.mark(party)?;
    workspace.write_batch_metadata(batch, &metadata)?;
    info!(batch = %batch, party, complete = metadata.is_reviewed.is_complete(), "Review recorded");
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CuratorError;
    use crate::metadata::ProjectMetadata;

    fn fixture() -> (tempfile::TempDir, Workspace, BatchRef) {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path(), "projects");
        ws.create_project("acme", &ProjectMetadata::default()).unwrap();
        let batch = BatchRef::new("acme", "b1").unwrap();
        ws.create_batch(&batch, &BatchMetadata::new("First", 2), None)
            .unwrap();
        (tmp, ws, batch)
    }

    #[test]
    fn marks_one_party() {
        let (_tmp, ws, batch) = fixture();
        let meta = update_review_status(&ws, &batch, 2).unwrap();
        assert_eq!(meta.is_reviewed.as_slice(), &[false, true]);
        assert_eq!(
            ws.read_batch_metadata(&batch).unwrap().is_reviewed.as_slice(),
            &[false, true]
        );
    }

    #[test]
    fn out_of_range_leaves_file_byte_identical() {
        let (_tmp, ws, batch) = fixture();
        let path = ws.batch_metadata_path(&batch);
        let before = std::fs::read(&path).unwrap();

        let err = update_review_status(&ws, &batch, 5).unwrap_err();
        assert!(matches!(err, CuratorError::Validation(_)));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn missing_batch_is_not_found() {
        let (_tmp, ws, _batch) = fixture();
        let ghost = BatchRef::new("acme", "ghost").unwrap();
        assert!(matches!(
            update_review_status(&ws, &ghost, 1),
            Err(CuratorError::NotFound(_))
        ));
    }
}
