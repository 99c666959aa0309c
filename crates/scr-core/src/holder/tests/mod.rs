pub mod reference_tests;
