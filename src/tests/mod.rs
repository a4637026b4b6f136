//! Cross-module test suites. Unit tests live next to the code they cover.

mod window_properties;
