fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Server stubs back the in-process registry used by client tests
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/onos/configmodel/registry.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/onos/configmodel/registry.proto");

    Ok(())
}
