mod lifecycle_tests;
mod messaging_tests;
