use r2d2::event::{
    AcquireEvent, CheckinEvent, CheckoutEvent, HandleEvent, ReleaseEvent, TimeoutEvent,
};

/// Forwards r2d2 pool lifecycle events to the `log` facade, tagged with the pool name
#[derive(Debug)]
pub struct PoolEventLogger {
    pool_name: String,
}

impl PoolEventLogger {
    pub fn new(pool_name: &str) -> Self {
        Self {
            pool_name: pool_name.to_string(),
        }
    }
}

impl HandleEvent for PoolEventLogger {
    fn handle_acquire(&self, event: AcquireEvent) {
        log::debug!(
            "[{}] opened connection {}",
            self.pool_name, event.connection_id()
        );
    }

    fn handle_release(&self, event: ReleaseEvent) {
        log::debug!(
            "[{}] closed connection {} (age {:?})",
            self.pool_name,
            event.connection_id(),
            event.age()
        );
    }

    fn handle_checkout(&self, event: CheckoutEvent) {
        log::debug!(
            "[{}] checked out connection {} after {:?}",
            self.pool_name,
            event.connection_id(),
            event.duration()
        );
    }

    fn handle_timeout(&self, event: TimeoutEvent) {
        log::warn!(
            "[{}] timed out after {:?} waiting for a connection",
            self.pool_name,
            event.timeout()
        );
    }

    fn handle_checkin(&self, event: CheckinEvent) {
        log::debug!(
            "[{}] checked in connection {} after {:?} in use",
            self.pool_name,
            event.connection_id(),
            event.duration()
        );
    }
}
