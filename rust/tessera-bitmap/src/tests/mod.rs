mod parallel_tests;
mod predict_tests;
