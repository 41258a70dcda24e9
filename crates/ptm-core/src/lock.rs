//! Subtree locking for structural operations
//!
//! A structural operation claims a section: a set of paths in one workspace,
//! each covering its whole subtree. Two sections conflict when any of their
//! paths are equal or one is an ancestor of the other.
//!
//! Sections are granted first-come-first-served among conflicting requests
//! (every request draws a ticket and waits for all earlier conflicting
//! tickets). A thread that already holds a section:
//! - gets [`ProjectError::Conflict`] if it asks for an overlapping one
//! - only waits for granted sections otherwise, so a handler calling back
//!   into the manager for an unrelated path cannot deadlock against queued
//!   requests waiting on its caller

use crate::error::ProjectError;
use parking_lot::{Condvar, Mutex};
use ptm_vfs::{TreePath, WorkspaceId};
use std::fmt;
use std::thread::{self, ThreadId};

#[derive(Debug)]
struct Section {
    ticket: u64,
    workspace: WorkspaceId,
    paths: Vec<TreePath>,
    owner: ThreadId,
    granted: bool,
}

impl Section {
    fn overlaps(&self, workspace: &WorkspaceId, paths: &[TreePath]) -> bool {
        self.workspace == *workspace
            && self
                .paths
                .iter()
                .any(|held| paths.iter().any(|p| held.overlaps(p)))
    }
}

#[derive(Debug, Default)]
struct LockState {
    next_ticket: u64,
    /// Granted and waiting sections, in ticket order
    sections: Vec<Section>,
}

/// Table of in-flight structural sections
#[derive(Default)]
pub struct PathLockTable {
    state: Mutex<LockState>,
    released: Condvar,
}

impl PathLockTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the subtrees under `paths` are exclusively ours
    ///
    /// # Errors
    /// `ProjectError::Conflict` if the calling thread already holds an
    /// overlapping section
    pub fn acquire(
        &self,
        workspace: &WorkspaceId,
        paths: &[TreePath],
    ) -> Result<PathGuard<'_>, ProjectError> {
        let owner = thread::current().id();
        let mut state = self.state.lock();

        if let Some(held) = state
            .sections
            .iter()
            .find(|s| s.granted && s.owner == owner && s.overlaps(workspace, paths))
        {
            return Err(ProjectError::conflict(format!(
                "{} is already locked by this caller ({})",
                display_paths(paths),
                display_paths(&held.paths)
            )));
        }
        let reentrant = state.sections.iter().any(|s| s.granted && s.owner == owner);

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.sections.push(Section {
            ticket,
            workspace: workspace.clone(),
            paths: paths.to_vec(),
            owner,
            granted: false,
        });

        loop {
            // granted sections block regardless of ticket: a reentrant
            // caller may hold a later one than ours
            let blocked = state.sections.iter().any(|s| {
                s.ticket != ticket
                    && (s.granted || (s.ticket < ticket && !reentrant))
                    && s.overlaps(workspace, paths)
            });
            if !blocked {
                break;
            }
            tracing::trace!(ticket, %workspace, paths = %display_paths(paths), "waiting for section");
            self.released.wait(&mut state);
        }

        if let Some(section) = state.sections.iter_mut().find(|s| s.ticket == ticket) {
            section.granted = true;
        }
        tracing::trace!(ticket, %workspace, paths = %display_paths(paths), "section granted");
        Ok(PathGuard {
            table: self,
            ticket,
        })
    }

    /// Number of granted sections
    #[must_use]
    pub fn held(&self) -> usize {
        self.state.lock().sections.iter().filter(|s| s.granted).count()
    }

    /// Number of requests still waiting
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.state.lock().sections.iter().filter(|s| !s.granted).count()
    }

    fn release(&self, ticket: u64) {
        let mut state = self.state.lock();
        state.sections.retain(|s| s.ticket != ticket);
        drop(state);
        tracing::trace!(ticket, "section released");
        self.released.notify_all();
    }
}

impl fmt::Debug for PathLockTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathLockTable")
            .field("held", &self.held())
            .field("waiting", &self.waiting())
            .finish()
    }
}

/// Exclusive section; released on drop
#[must_use = "the section is released as soon as the guard is dropped"]
pub struct PathGuard<'a> {
    table: &'a PathLockTable,
    ticket: u64,
}

impl fmt::Debug for PathGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathGuard")
            .field("ticket", &self.ticket)
            .finish()
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.table.release(self.ticket);
    }
}

fn display_paths(paths: &[TreePath]) -> String {
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    fn p(s: &str) -> TreePath {
        TreePath::parse(s).unwrap()
    }

    fn ws(id: &str) -> WorkspaceId {
        WorkspaceId::new(id)
    }

    #[test]
    fn guard_releases_on_drop() {
        let table = PathLockTable::new();
        {
            let _guard = table.acquire(&ws("w"), &[p("/a")]).unwrap();
            assert_eq!(table.held(), 1);
        }
        assert_eq!(table.held(), 0);
    }

    #[test]
    fn overlapping_reentry_is_conflict() {
        let table = PathLockTable::new();
        let _guard = table.acquire(&ws("w"), &[p("/a")]).unwrap();
        let err = table.acquire(&ws("w"), &[p("/a/b")]).unwrap_err();
        assert!(matches!(err, ProjectError::Conflict(_)));
        // ancestor overlaps as well
        assert!(table.acquire(&ws("w"), &[p("/")]).is_err());
    }

    #[test]
    fn disjoint_reentry_proceeds() {
        let table = PathLockTable::new();
        let _a = table.acquire(&ws("w"), &[p("/a")]).unwrap();
        let _b = table.acquire(&ws("w"), &[p("/b")]).unwrap();
        let _other_ws = table.acquire(&ws("v"), &[p("/a")]).unwrap();
        assert_eq!(table.held(), 3);
    }

    #[test]
    fn overlapping_sections_never_interleave() {
        let table = Arc::new(PathLockTable::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let table = Arc::clone(&table);
                let inside = Arc::clone(&inside);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let path = if i % 2 == 0 { p("/x") } else { p("/x/child") };
                    barrier.wait();
                    for _ in 0..20 {
                        let _guard = table.acquire(&ws("w"), &[path.clone()]).unwrap();
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(table.held(), 0);
        assert_eq!(table.waiting(), 0);
    }

    #[test]
    fn waiters_are_served_in_arrival_order() {
        let table = Arc::new(PathLockTable::new());
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let first = table.acquire(&ws("w"), &[p("/x")]).unwrap();

        let mut workers = Vec::new();
        for i in 0..3 {
            let worker_table = Arc::clone(&table);
            let order = Arc::clone(&order);
            workers.push(thread::spawn(move || {
                let _guard = worker_table.acquire(&ws("w"), &[p("/x")]).unwrap();
                order.lock().push(i);
            }));
            // let each worker enqueue before the next one starts
            while table.waiting() < i + 1 {
                thread::sleep(Duration::from_millis(1));
            }
        }

        drop(first);
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn reentrant_caller_skips_queued_waiters() {
        let table = Arc::new(PathLockTable::new());
        let held = table.acquire(&ws("w"), &[p("/a")]).unwrap();

        // another caller queues for /a and /b together
        let queued = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                let _guard = table.acquire(&ws("w"), &[p("/a/x"), p("/b")]).unwrap();
            })
        };
        while table.waiting() < 1 {
            thread::sleep(Duration::from_millis(1));
        }

        // /b is only wanted by a waiter, so the holder of /a can take it
        let nested = table.acquire(&ws("w"), &[p("/b")]).unwrap();
        drop(nested);
        drop(held);
        queued.join().unwrap();
        assert_eq!(table.held(), 0);
    }

    #[test]
    fn waiter_respects_nested_section_outliving_outer() {
        let table = Arc::new(PathLockTable::new());
        let outer = table.acquire(&ws("w"), &[p("/a")]).unwrap();

        let granted = Arc::new(AtomicUsize::new(0));
        let queued = {
            let table = Arc::clone(&table);
            let granted = Arc::clone(&granted);
            thread::spawn(move || {
                let _guard = table.acquire(&ws("w"), &[p("/a/x"), p("/b")]).unwrap();
                granted.store(1, Ordering::SeqCst);
            })
        };
        while table.waiting() < 1 {
            thread::sleep(Duration::from_millis(1));
        }

        let nested = table.acquire(&ws("w"), &[p("/b")]).unwrap();
        drop(outer);
        thread::sleep(Duration::from_millis(50));
        // /b is still ours
        assert_eq!(granted.load(Ordering::SeqCst), 0);
        assert_eq!(table.held(), 1);
        assert_eq!(table.waiting(), 1);

        drop(nested);
        queued.join().unwrap();
        assert_eq!(granted.load(Ordering::SeqCst), 1);
        assert_eq!(table.held(), 0);
    }
}
