use clap::ValueEnum;
use gfxbuild_utils::constants::{GRYPE, TRIVY};
use log::trace;

pub trait DetermineDriver<T> {
    fn determine_driver(&mut self) -> Option<T>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScanDriverType {
    Trivy,
    Grype,
}

impl ScanDriverType {
    #[must_use]
    pub const fn binary(self) -> &'static str {
        match self {
            Self::Trivy => TRIVY,
            Self::Grype => GRYPE,
        }
    }
}

impl std::fmt::Display for ScanDriverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

impl DetermineDriver<ScanDriverType> for Option<ScanDriverType> {
    /// Uses the selected scanner, otherwise the first of
    /// trivy or grype found in `PATH`.
    fn determine_driver(&mut self) -> Option<ScanDriverType> {
        trace!("ScanDriverType::determine_driver()");

        if self.is_none() {
            *self = [ScanDriverType::Trivy, ScanDriverType::Grype]
                .into_iter()
                .find(|scanner| gfxbuild_utils::check_command_exists(scanner.binary()).is_ok());
        }
        *self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn selected_scanner_is_kept() {
        let mut selected = Some(ScanDriverType::Grype);

        assert_eq!(selected.determine_driver(), Some(ScanDriverType::Grype));
    }

    #[test]
    fn display_is_binary_name() {
        assert_eq!(ScanDriverType::Trivy.to_string(), "trivy");
        assert_eq!(ScanDriverType::Grype.to_string(), "grype");
    }
}
