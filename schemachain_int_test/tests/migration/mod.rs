mod chain_test;
mod drift_test;
mod lock_test;
mod revision_file_test;
