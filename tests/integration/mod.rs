mod files {
    include!("files.rs");
}
mod api {
    include!("api.rs");
}
