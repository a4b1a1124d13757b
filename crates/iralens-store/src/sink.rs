use std::sync::{Mutex, MutexGuard, PoisonError};

use iralens_core::ResultRow;

/// Append-only collection of result rows shared by concurrent workers.
#[derive(Debug, Default)]
pub struct ResultSink {
    rows: Mutex<Vec<ResultRow>>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking worker must not cost the rows already appended.
    fn rows(&self) -> MutexGuard<'_, Vec<ResultRow>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, row: ResultRow) {
        self.rows().push(row);
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    /// Copy of the rows appended so far, in append order.
    pub fn snapshot(&self) -> Vec<ResultRow> {
        self.rows().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn row(name: &str) -> ResultRow {
        ResultRow {
            company_name: name.into(),
            domain: format!("{name}.com"),
            status: "completed".into(),
            ..ResultRow::default()
        }
    }

    #[test]
    fn appends_in_order() {
        let sink = ResultSink::new();
        assert!(sink.is_empty());
        sink.push(row("a"));
        sink.push(row("b"));
        let names: Vec<_> = sink.snapshot().into_iter().map(|r| r.company_name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn concurrent_pushes_are_all_kept() {
        let sink = Arc::new(ResultSink::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        sink.push(row(&format!("c{i}_{j}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.len(), 400);
    }
}
