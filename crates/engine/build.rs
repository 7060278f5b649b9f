fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    println!("cargo:rerun-if-changed=proto/code_audit.proto");
    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile(&["proto/code_audit.proto"], &["proto"])?;
    Ok(())
}
