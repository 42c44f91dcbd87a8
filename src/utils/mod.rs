pub mod company_cache;
pub mod db_utils;
