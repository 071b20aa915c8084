//! System configuration.

use keel_core::KernelError;

/// Configuration consumed by [`System::new`](crate::System::new).
#[derive(Clone, Debug)]
pub struct SystemConfig {
    /// Name of the root inertial-space object.
    pub root_name: String,
    /// Type string of the root object.
    pub root_type: String,
    /// Initial global simulation time (MJD).
    pub initial_time: f64,
    /// First automatically assigned object uid; subsequent objects
    /// count up from here.
    pub first_uid: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            root_name: "root".to_owned(),
            root_type: "inertial_space".to_owned(),
            initial_time: 0.0,
            first_uid: 1,
        }
    }
}

impl SystemConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), KernelError> {
        if self.root_name.is_empty() || !self.initial_time.is_finite() {
            return Err(KernelError::BadParameter);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_validates() {
        assert!(SystemConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_root_name_and_nonfinite_time() {
        let mut c = SystemConfig::default();
        c.root_name.clear();
        assert_eq!(c.validate(), Err(KernelError::BadParameter));

        let mut c = SystemConfig::default();
        c.initial_time = f64::NAN;
        assert_eq!(c.validate(), Err(KernelError::BadParameter));
    }
}
