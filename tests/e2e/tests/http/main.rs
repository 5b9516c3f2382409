
pub use custodia_test_utils as test_utils;
