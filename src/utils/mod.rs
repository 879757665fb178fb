pub mod byte_size;
pub mod curl_parser;
