mod pointer;

pub use pointer::{
    to_pixel, ClientPoint, CoordinateMapper, OriginOffset, PointerEvent, ScrollOffset,
};
