//! Transient toast messages raised by mutation outcomes.
//!
//! Each notification carries its own dismiss timer. Hovering a toast pauses
//! the timer and leaving resumes it with whatever time was left. Expired
//! notifications are removed by [`Notifications::sweep`], which a background
//! task runs at a fixed cadence.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;
use uuid::Uuid;

use crate::cache::mutex_lock;

const SOURCE: &str = "application::notifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
    pub created_at: OffsetDateTime,
    pub auto_dismiss_after: Duration,
}

/// A notification still on screen, with the time left before it goes away.
#[derive(Debug, Clone)]
pub struct VisibleNotification {
    pub notification: Notification,
    pub remaining: Duration,
    pub paused: bool,
}

#[derive(Debug, Clone, Copy)]
enum Timer {
    Running { deadline: Instant },
    Paused { remaining: Duration },
}

impl Timer {
    fn remaining(self, now: Instant) -> Duration {
        match self {
            Timer::Running { deadline } => deadline.saturating_duration_since(now),
            Timer::Paused { remaining } => remaining,
        }
    }
}

struct Pending {
    notification: Notification,
    timer: Timer,
}

/// Shared notification queue. Cloning is cheap; clones see the same queue.
#[derive(Clone)]
pub struct Notifications {
    queue: Arc<Mutex<Vec<Pending>>>,
    auto_dismiss_after: Duration,
}

impl Notifications {
    pub fn new(auto_dismiss_after: Duration) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Vec::new())),
            auto_dismiss_after,
        }
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.push(Severity::Success, message.into())
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        self.push(Severity::Error, message.into())
    }

    fn push(&self, severity: Severity, message: String) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            message,
            severity,
            created_at: OffsetDateTime::now_utc(),
            auto_dismiss_after: self.auto_dismiss_after,
        };
        let id = notification.id;
        debug!(
            id = %id,
            severity = severity.as_str(),
            message = %notification.message,
            "Notification raised"
        );

        let timer = Timer::Running {
            deadline: Instant::now() + self.auto_dismiss_after,
        };
        mutex_lock(&self.queue, SOURCE, "push").push(Pending {
            notification,
            timer,
        });
        id
    }

    /// Remove a notification. Returns false when it is already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut queue = mutex_lock(&self.queue, SOURCE, "dismiss");
        let before = queue.len();
        queue.retain(|pending| pending.notification.id != id);
        before != queue.len()
    }

    /// Pause the dismiss timer while the pointer is over the toast.
    pub fn hover(&self, id: Uuid) -> bool {
        let now = Instant::now();
        self.update_timer(id, "hover", |timer| match timer {
            Timer::Running { .. } => Timer::Paused {
                remaining: timer.remaining(now),
            },
            paused => paused,
        })
    }

    /// Resume a paused dismiss timer.
    pub fn unhover(&self, id: Uuid) -> bool {
        let now = Instant::now();
        self.update_timer(id, "unhover", |timer| match timer {
            Timer::Paused { remaining } => Timer::Running {
                deadline: now + remaining,
            },
            running => running,
        })
    }

    fn update_timer(&self, id: Uuid, op: &'static str, f: impl FnOnce(Timer) -> Timer) -> bool {
        let mut queue = mutex_lock(&self.queue, SOURCE, op);
        match queue
            .iter_mut()
            .find(|pending| pending.notification.id == id)
        {
            Some(pending) => {
                pending.timer = f(pending.timer);
                true
            }
            None => false,
        }
    }

    /// Drop expired notifications and return how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut queue = mutex_lock(&self.queue, SOURCE, "sweep");
        let before = queue.len();
        queue.retain(|pending| !pending.timer.remaining(now).is_zero());
        let removed = before - queue.len();
        if removed > 0 {
            debug!(removed, "Expired notifications swept");
        }
        removed
    }

    /// Notifications still on screen, newest first.
    pub fn visible(&self) -> Vec<VisibleNotification> {
        let now = Instant::now();
        let queue = mutex_lock(&self.queue, SOURCE, "visible");
        queue
            .iter()
            .rev()
            .filter_map(|pending| {
                let remaining = pending.timer.remaining(now);
                (!remaining.is_zero()).then(|| VisibleNotification {
                    notification: pending.notification.clone(),
                    remaining,
                    paused: matches!(pending.timer, Timer::Paused { .. }),
                })
            })
            .collect()
    }

    /// Run [`sweep`](Self::sweep) every `interval` until the handle is aborted.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let notifications = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                notifications.sweep();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::advance;

    use super::*;

    fn channel() -> Notifications {
        Notifications::new(Duration::from_secs(3))
    }

    #[tokio::test(start_paused = true)]
    async fn notifications_expire_after_timeout() {
        let notifications = channel();
        notifications.success("User created successfully!");

        advance(Duration::from_millis(2900)).await;
        assert_eq!(notifications.sweep(), 0);
        assert_eq!(notifications.visible().len(), 1);

        advance(Duration::from_millis(200)).await;
        assert!(notifications.visible().is_empty());
        assert_eq!(notifications.sweep(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn newest_first_without_deduplication() {
        let notifications = channel();
        notifications.error("Failed to create user");
        notifications.error("Failed to create user");
        notifications.success("Product created successfully!");

        let visible = notifications.visible();
        let messages: Vec<_> = visible
            .iter()
            .map(|entry| entry.notification.message.as_str())
            .collect();
        assert_eq!(
            messages,
            vec![
                "Product created successfully!",
                "Failed to create user",
                "Failed to create user"
            ]
        );
        assert_eq!(visible[0].notification.severity, Severity::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn hover_pauses_and_leave_resumes() {
        let notifications = channel();
        let id = notifications.success("saved");

        advance(Duration::from_secs(1)).await;
        assert!(notifications.hover(id));

        advance(Duration::from_secs(10)).await;
        notifications.sweep();
        let visible = notifications.visible();
        assert_eq!(visible.len(), 1);
        assert!(visible[0].paused);
        assert_eq!(visible[0].remaining, Duration::from_secs(2));

        assert!(notifications.unhover(id));
        advance(Duration::from_millis(1900)).await;
        assert_eq!(notifications.sweep(), 0);
        advance(Duration::from_millis(200)).await;
        assert_eq!(notifications.sweep(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_removes_immediately() {
        let notifications = channel();
        let id = notifications.error("nope");
        assert!(notifications.dismiss(id));
        assert!(!notifications.dismiss(id));
        assert!(!notifications.hover(id));
        assert!(notifications.visible().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_clears_expired() {
        let notifications = channel();
        notifications.success("saved");
        let sweeper = notifications.spawn_sweeper(Duration::from_millis(250));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(notifications.visible().is_empty());
        assert_eq!(notifications.sweep(), 0);

        sweeper.abort();
    }
}
