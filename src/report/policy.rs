use std::collections::{BTreeMap, HashSet};

use crate::config::PolicyConfig;
use crate::constants::MAX_FIELD_SIZE;
use crate::report::CrashReport;

/// Fields uploaded unconditionally, no matter their size.
pub const DEFAULT_ACCEPTED_FIELDS: &[&str] = &[
    "ProblemType",
    "Date",
    "Signal",
    "PythonArgs",
    "Package",
    "SourcePackage",
    "PackageArchitecture",
    "Dependencies",
    "MachineType",
    "StacktraceAddressSignature",
    "ApportVersion",
    "DuplicateSignature",
    "DistroRelease",
    "Uname",
    "Architecture",
    "NonfreeKernelModules",
    "LiveMediaBuild",
    "UserGroups",
    "ExecutablePath",
    "InterpreterPath",
    "ExecutableTimestamp",
    "ProcCwd",
    "ProcEnviron",
    "ProcCmdline",
    "ProcStatus",
    "ProcMaps",
    "ProcAttrCurrent",
    "Registers",
    "Disassembly",
    "StacktraceTop",
    "AssertionMessage",
    "CoreDump",
    "VmCore",
    "Tags",
    "OopsText",
    "UpgradeStatus",
    "InstallationDate",
    "InstallationMedia",
    "IwlFwDump",
    "SystemImageInfo",
];

/// Fields never uploaded. Stack traces are recomputed server side from the
/// core dump, counters and markers are local bookkeeping.
pub const DEFAULT_REJECTED_FIELDS: &[&str] = &[
    "Stacktrace",
    "ThreadStacktrace",
    "Traceback",
    "UnreportableReason",
    "CrashCounter",
    "_MarkForUpload",
    "Title",
];

/// Upload classification of a field name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Uploaded whatever its size
    Accepted,
    /// Never uploaded
    Rejected,
    /// Uploaded if its first value fits under the size cap
    SizeLimited,
}

/// Decides which report fields leave the device.
///
/// Classification depends only on the field name and, for size limited
/// fields, on the byte length of the first value. Only the first value of a
/// multi-valued field is ever uploaded, so the cap applies to that value
/// alone.
#[derive(Debug, Clone)]
pub struct FieldPolicy {
    accepted: HashSet<String>,
    rejected: HashSet<String>,
    max_field_size: usize,
}

impl Default for FieldPolicy {
    fn default() -> Self {
        FieldPolicy::new(
            DEFAULT_ACCEPTED_FIELDS.iter().copied(),
            DEFAULT_REJECTED_FIELDS.iter().copied(),
            MAX_FIELD_SIZE,
        )
    }
}

impl FieldPolicy {
    pub fn new<A, R>(accepted: A, rejected: R, max_field_size: usize) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        FieldPolicy {
            accepted: accepted.into_iter().map(Into::into).collect(),
            rejected: rejected.into_iter().map(Into::into).collect(),
            max_field_size,
        }
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        FieldPolicy::new(
            config.accepted_fields.iter().cloned(),
            config.rejected_fields.iter().cloned(),
            config.max_field_size,
        )
    }

    pub fn max_field_size(&self) -> usize {
        self.max_field_size
    }

    /// Rejection takes precedence over acceptance.
    pub fn classify(&self, name: &str) -> FieldClass {
        if self.rejected.contains(name) {
            FieldClass::Rejected
        } else if self.accepted.contains(name) {
            FieldClass::Accepted
        } else {
            FieldClass::SizeLimited
        }
    }

    /// Whether a field with these values is uploaded
    pub fn admits(&self, name: &str, values: &[String]) -> bool {
        let Some(first) = values.first() else {
            return false;
        };

        match self.classify(name) {
            FieldClass::Rejected => false,
            FieldClass::Accepted => true,
            FieldClass::SizeLimited => first.len() <= self.max_field_size,
        }
    }

    /// Flatten `report` to the first value of every admitted field
    pub fn filter(&self, report: &CrashReport) -> BTreeMap<String, String> {
        report
            .fields()
            .filter(|field| self.admits(field.name(), field.values()))
            .filter_map(|field| Some((field.name().to_string(), field.first()?.to_string())))
            .collect()
    }

    /// Filter `report` and encode the result as a CBOR map
    pub fn encode(&self, report: &CrashReport) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let filtered = self.filter(report);
        let mut body = Vec::new();
        ciborium::ser::into_writer(&filtered, &mut body)?;
        Ok(body)
    }
}
