// Test modules for Threadline
// Each module covers the corresponding source module; `helpers` holds the
// in-process fakes of the REST API and the live connection.

mod helpers;

mod connection_tests;
