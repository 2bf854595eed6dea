// Aggregates all integration tests as modules.
mod byte_stream;
mod config_file;
mod fragmentation;
