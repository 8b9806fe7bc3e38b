//! Messages of `fileformat.proto`, the envelope around every block.
//!
//! Fields the schema marks `required` are declared optional here so a
//! missing one can be told apart from a zero value.

/// Per-frame header.
#[derive(Clone, PartialEq, prost::Message)]
pub struct BlobHeader {
    #[prost(string, optional, tag = "1")]
    pub r#type: Option<String>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub indexdata: Option<Vec<u8>>,
    #[prost(int32, optional, tag = "3")]
    pub datasize: Option<i32>,
}

/// Blob envelope. Exactly one `data` member is set by a valid writer.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Blob {
    #[prost(int32, optional, tag = "2")]
    pub raw_size: Option<i32>,
    #[prost(oneof = "blob::Data", tags = "1, 3, 4, 5, 6, 7")]
    pub data: Option<blob::Data>,
}

pub mod blob {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Data {
        #[prost(bytes, tag = "1")]
        Raw(Vec<u8>),
        #[prost(bytes, tag = "3")]
        ZlibData(Vec<u8>),
        #[prost(bytes, tag = "4")]
        LzmaData(Vec<u8>),
        #[prost(bytes, tag = "5")]
        ObsoleteBzip2Data(Vec<u8>),
        #[prost(bytes, tag = "6")]
        Lz4Data(Vec<u8>),
        #[prost(bytes, tag = "7")]
        ZstdData(Vec<u8>),
    }
}
