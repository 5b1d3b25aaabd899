pub mod acquiring_client;
