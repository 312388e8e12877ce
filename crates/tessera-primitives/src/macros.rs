#[macro_export]
macro_rules! datatype_registry_entries {
    ($macro:ident $(, @args $($args:tt)+ )?) => {
        $macro! {
            $(
                @args $($args)+;
            )?
            @entries
            (Int8, "int8", SignedInteger, size = Some(1), supports_tile_extent = true),
            (Int16, "int16", SignedInteger, size = Some(2), supports_tile_extent = true),
            (Int32, "int32", SignedInteger, size = Some(4), supports_tile_extent = true),
            (Int64, "int64", SignedInteger, size = Some(8), supports_tile_extent = true),
            (Uint8, "uint8", UnsignedInteger, size = Some(1), supports_tile_extent = true),
            (Uint16, "uint16", UnsignedInteger, size = Some(2), supports_tile_extent = true),
            (Uint32, "uint32", UnsignedInteger, size = Some(4), supports_tile_extent = true),
            (Uint64, "uint64", UnsignedInteger, size = Some(8), supports_tile_extent = true),
            (Float32, "float32", Float, size = Some(4), supports_tile_extent = true),
            (Float64, "float64", Float, size = Some(8), supports_tile_extent = true),
            (StringAscii, "string_ascii", String, size = None, supports_tile_extent = false),
        }
    };
}

#[macro_export]
macro_rules! datatype_registry {
    ($macro:ident) => {
        $crate::datatype_registry_entries!($macro)
    };
    ($macro:ident, $($args:tt)+) => {
        $crate::datatype_registry_entries!($macro, @args $($args)+)
    };
}

macro_rules! metadata_from_registry {
    ( @args $kind:expr; @entries $( ($datatype:ident, $name:literal, $family:ident, size = $size:expr, supports_tile_extent = $extent:expr) ),* $(,)? ) => {
        match $kind {
            $(
                $crate::Datatype::$datatype => $crate::DatatypeMetadata {
                    name: $name,
                    family: $crate::DatatypeFamily::$family,
                    size: $size,
                    supports_tile_extent: $extent,
                },
            )*
        }
    };
}

macro_rules! all_datatypes_from_registry {
    ( @entries $( ($datatype:ident, $name:literal, $family:ident, size = $size:expr, supports_tile_extent = $extent:expr) ),* $(,)? ) => {
        [ $( $crate::Datatype::$datatype ),* ]
    };
}
