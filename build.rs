use time::macros::format_description;

fn main() {
    println!("cargo:rerun-if-env-changed=PMAP_BUILD_DATE");

    // Reproducible builds pin the date through the environment.
    let date = std::env::var("PMAP_BUILD_DATE").unwrap_or_else(|_| {
        time::OffsetDateTime::now_utc()
            .format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_else(|_| "unknown".to_string())
    });

    println!("cargo:rustc-env=PMAP_BUILD_DATE={}", date);
}
