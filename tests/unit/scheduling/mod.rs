pub mod chunked_ingest;
