use crate::error::InjectionError;
use crate::replay::Operation;

/// Target of replayed input
///
/// `Sleep` is handled by the engine and never reaches a sink.
pub trait InputSink: Send {
    fn perform(&mut self, operation: &Operation) -> Result<(), InjectionError>;
}

impl<S: InputSink + ?Sized> InputSink for Box<S> {
    fn perform(&mut self, operation: &Operation) -> Result<(), InjectionError> {
        (**self).perform(operation)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex as ParkingMutex;
    use std::sync::Arc;

    /// Sink that records what it was asked to perform
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub performed: Arc<ParkingMutex<Vec<Operation>>>,
        /// Operations the fake OS rejects
        pub rejects: Vec<Operation>,
    }

    impl InputSink for RecordingSink {
        fn perform(&mut self, operation: &Operation) -> Result<(), InjectionError> {
            if self.rejects.contains(operation) {
                return Err(InjectionError::new(operation, "rejected"));
            }
            self.performed.lock().push(*operation);
            Ok(())
        }
    }
}
