//! Question Bank - persist generated questions between runs
//!
//! Questions live in memory and are written to a single JSON file, replaced
//! atomically via a temp file. [`QuestionBank::add`] only keeps a question in
//! memory once it is on disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};
use crate::models::{Grade, Question, StoredQuestion};

/// Persisted list of coding questions
#[derive(Debug)]
pub struct QuestionBank {
    path: PathBuf,
    questions: Vec<StoredQuestion>,
}

impl QuestionBank {
    /// Load the bank at `path`; a missing file yields an empty bank.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let questions = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, questions })
    }

    /// Write all questions to disk.
    pub fn save(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.questions)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Store a question and persist the bank.
    ///
    /// If the file cannot be written the bank is left as it was.
    pub fn add(&mut self, question: Question) -> StoreResult<StoredQuestion> {
        let stored = StoredQuestion {
            id: uuid::Uuid::new_v4().to_string(),
            question,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.questions.push(stored.clone());

        if let Err(e) = self.save() {
            self.questions.pop();
            return Err(e);
        }
        Ok(stored)
    }

    /// All questions in insertion order
    pub fn list(&self) -> &[StoredQuestion] {
        &self.questions
    }

    /// Look up by 1-based position or by id.
    pub fn get(&self, reference: &str) -> StoreResult<&StoredQuestion> {
        let by_position = reference
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.questions.get(i));

        by_position
            .or_else(|| self.questions.iter().find(|q| q.id == reference))
            .ok_or_else(|| StoreError::NotFound(reference.to_string()))
    }

    /// Grade a candidate's produced output against a stored question.
    pub fn check(&self, reference: &str, produced: &str) -> StoreResult<Grade> {
        let stored = self.get(reference)?;
        Ok(Grade::compare(&stored.question.expected_output, produced))
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn question(text: &str, expected: &str) -> Question {
        Question {
            question: text.to_string(),
            sample_input: String::new(),
            expected_output: expected.to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_empty_bank() {
        let dir = tempdir().unwrap();
        let bank = QuestionBank::open(dir.path().join("questions.json")).unwrap();
        assert!(bank.is_empty());
    }

    #[test]
    fn test_add_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/questions.json");

        let mut bank = QuestionBank::open(&path).unwrap();
        let first = bank.add(question("Reverse a string", "cba")).unwrap();
        bank.add(question("Sum a list", "6")).unwrap();

        let reopened = QuestionBank::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.list()[0], first);
        assert_eq!(reopened.get("2").unwrap().question.question, "Sum a list");
        assert_eq!(reopened.get(&first.id).unwrap().id, first.id);
    }

    #[test]
    fn test_failed_save_leaves_bank_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("q.json");
        // A directory where the temp file should go makes the write fail
        fs::create_dir(dir.path().join("q.json.tmp")).unwrap();

        let mut bank = QuestionBank::open(&path).unwrap();
        let err = bank.add(question("Reverse a string", "cba")).unwrap_err();

        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(bank.len(), 0);
        assert!(bank.list().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_get_unknown_reference() {
        let dir = tempdir().unwrap();
        let bank = QuestionBank::open(dir.path().join("q.json")).unwrap();

        assert!(matches!(bank.get("1"), Err(StoreError::NotFound(_))));
        assert!(matches!(bank.get("0"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_check_output() {
        let dir = tempdir().unwrap();
        let mut bank = QuestionBank::open(dir.path().join("q.json")).unwrap();
        bank.add(question("Sum a list", "6\n")).unwrap();

        assert!(bank.check("1", " 6 ").unwrap().correct);
        let grade = bank.check("1", "7").unwrap();
        assert!(!grade.correct);
        assert_eq!(grade.expected, "6");
        assert_eq!(grade.got, "7");
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("q.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(QuestionBank::open(&path), Err(StoreError::Json(_))));
    }
}
