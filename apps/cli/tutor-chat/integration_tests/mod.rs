// Integration tests for the console session against a mock HTTP server

mod audio;
