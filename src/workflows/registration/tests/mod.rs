mod codes;
mod common;
mod notify;
