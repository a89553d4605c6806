// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

fn main() {
    protobuf_codegen::Codegen::new()
        .pure()
        .include("src/osm/reader/pbf")
        .input("src/osm/reader/pbf/fileformat.proto")
        .input("src/osm/reader/pbf/osmformat.proto")
        .cargo_out_dir("protos")
        .run_from_script();
}
