// Exit codes for CI triage
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_TEST_FAILURE: i32 = 1;
pub const EXIT_HARNESS_FAILURE: i32 = 2;
