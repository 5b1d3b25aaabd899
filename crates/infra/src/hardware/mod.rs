pub mod controller_client;
