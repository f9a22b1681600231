//! The ordered list of tests a suite exposes.

use std::fmt;

use clcts_common::Version;

use crate::context::TestEnv;
use crate::device::ComputeDevice;
use crate::error::RegistryError;
use crate::status::TestStatus;

/// Body signature for plain test functions.
///
/// Returns `0` on pass, [`TEST_SKIPPED_ITSELF`](crate::TEST_SKIPPED_ITSELF)
/// when the device lacks what the test needs, and anything else on failure.
pub type TestFn<D> = fn(&mut TestEnv<'_, D>) -> i32;

/// Body signature for closures that report a status directly.
pub type StatusFn<D> = Box<dyn Fn(&mut TestEnv<'_, D>) -> TestStatus>;

/// A single runnable test as the dispatch loop sees it.
pub trait TestCase<D: ComputeDevice> {
    fn name(&self) -> &str;

    /// Oldest device version the test can run on.
    fn min_version(&self) -> Version {
        Version::V1_0
    }

    /// Extension the device must report for the test to run.
    fn required_extension(&self) -> Option<&str> {
        None
    }

    /// `false` for tests that are declared but have no body yet.
    fn is_implemented(&self) -> bool {
        true
    }

    fn run(&self, env: &mut TestEnv<'_, D>) -> TestStatus;
}

enum Body<D: ComputeDevice> {
    Code(TestFn<D>),
    Status(StatusFn<D>),
    Missing,
}

/// A named test with its requirements. Built with [`test_def!`] for plain
/// functions, or with the constructors below.
///
/// [`test_def!`]: crate::test_def
pub struct TestDefinition<D: ComputeDevice> {
    name: String,
    min_version: Version,
    required_extension: Option<String>,
    body: Body<D>,
}

impl<D: ComputeDevice> TestDefinition<D> {
    pub fn from_fn(name: impl Into<String>, body: TestFn<D>) -> Self {
        Self::with_body(name.into(), Body::Code(body))
    }

    pub fn from_closure<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut TestEnv<'_, D>) -> TestStatus + 'static,
    {
        Self::with_body(name.into(), Body::Status(Box::new(body)))
    }

    /// A test that is listed but has no implementation.
    pub fn unimplemented(name: impl Into<String>) -> Self {
        Self::with_body(name.into(), Body::Missing)
    }

    fn with_body(name: String, body: Body<D>) -> Self {
        Self { name, min_version: Version::V1_0, required_extension: None, body }
    }

    pub fn with_min_version(mut self, version: Version) -> Self {
        self.min_version = version;
        self
    }

    pub fn with_required_extension(mut self, extension: impl Into<String>) -> Self {
        self.required_extension = Some(extension.into());
        self
    }
}

impl<D: ComputeDevice> TestCase<D> for TestDefinition<D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_version(&self) -> Version {
        self.min_version
    }

    fn required_extension(&self) -> Option<&str> {
        self.required_extension.as_deref()
    }

    fn is_implemented(&self) -> bool {
        !matches!(self.body, Body::Missing)
    }

    fn run(&self, env: &mut TestEnv<'_, D>) -> TestStatus {
        match &self.body {
            Body::Code(body) => TestStatus::from_code(body(env)),
            Body::Status(body) => body(env),
            Body::Missing => TestStatus::Skip,
        }
    }
}

impl<D: ComputeDevice> fmt::Debug for TestDefinition<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDefinition")
            .field("name", &self.name)
            .field("min_version", &self.min_version)
            .field("required_extension", &self.required_extension)
            .field("implemented", &self.is_implemented())
            .finish()
    }
}

/// Strip the conventional `test_` prefix from a body function's name.
pub fn strip_test_prefix(name: &str) -> &str {
    name.strip_prefix("test_").unwrap_or(name)
}

/// Build a [`TestDefinition`] from a `test_<name>` function.
///
/// ```ignore
/// registry.register(test_def!(test_int_add))?;
/// registry.register(test_def!(test_work_group_reduce, version = (2, 0)))?;
/// registry.register(test_def!(test_double_add, extension = "cl_khr_fp64"))?;
/// ```
#[macro_export]
macro_rules! test_def {
    ($func:ident $(, version = ($maj:expr, $min:expr))? $(, extension = $ext:expr)? $(,)?) => {{
        #[allow(unused_mut)]
        let mut def = $crate::registry::TestDefinition::from_fn(
            $crate::registry::strip_test_prefix(stringify!($func)),
            $func,
        );
        $( def = def.with_min_version($crate::Version::new($maj, $min)); )?
        $( def = def.with_required_extension($ext); )?
        def
    }};
}

/// Registration-ordered collection of tests.
pub struct TestRegistry<D: ComputeDevice> {
    tests: Vec<Box<dyn TestCase<D>>>,
}

impl<D: ComputeDevice> Default for TestRegistry<D> {
    fn default() -> Self {
        Self { tests: Vec::new() }
    }
}

impl<D: ComputeDevice> TestRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, test: T) -> Result<(), RegistryError>
    where
        T: TestCase<D> + 'static,
    {
        let name = test.name();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.position(name).is_some() {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        self.tests.push(Box::new(test));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn definition_at(&self, index: usize) -> Option<&(dyn TestCase<D> + 'static)> {
        self.tests.get(index).map(Box::as_ref)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.tests.iter().position(|t| t.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn TestCase<D> + 'static)> + '_ {
        self.tests.iter().map(Box::as_ref)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|t| t.name())
    }
}
