fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Messages live in src/grpc/messages.rs as prost derives, so only the
    // service scaffolding is generated here.
    let admission = tonic_build::manual::Service::builder()
        .name("Admission")
        .package("tipscribe.ratelimit.v1")
        .method(
            tonic_build::manual::Method::builder()
                .name("check")
                .route_name("Check")
                .input_type("crate::grpc::messages::CheckRequest")
                .output_type("crate::grpc::messages::CheckResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[admission]);
}
