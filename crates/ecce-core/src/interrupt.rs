use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation flag shared between the editor and whoever delivers
/// "stop now" requests (a signal handler in the CLI).
///
/// The editor polls it between units and between search steps; observing it
/// clears it.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Check and clear.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears_flag() {
        let i = Interrupt::new();
        let other = i.clone();
        assert!(!i.take());
        other.raise();
        assert!(i.is_raised());
        assert!(i.take());
        assert!(!other.is_raised());
    }
}
