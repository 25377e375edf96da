use crate::geometry::PixelPoint;

/// A client-space position as reported by the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientPoint {
    pub x: f64,
    pub y: f64,
}

impl ClientPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Raw pointer input: a mouse position or the active touch points.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Mouse(ClientPoint),
    Touch(Vec<ClientPoint>),
}

impl PointerEvent {
    pub const fn mouse(x: f64, y: f64) -> Self {
        Self::Mouse(ClientPoint::new(x, y))
    }

    pub fn touch(x: f64, y: f64) -> Self {
        Self::Touch(vec![ClientPoint::new(x, y)])
    }

    /// Mouse position, or the first touch point when several fingers are down.
    pub fn client_point(&self) -> Option<ClientPoint> {
        match self {
            Self::Mouse(point) => Some(*point),
            Self::Touch(points) => points.first().copied(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollOffset {
    pub left: f64,
    pub top: f64,
}

impl ScrollOffset {
    pub const fn new(left: f64, top: f64) -> Self {
        Self { left, top }
    }
}

/// Client-space position of image pixel (0, 0) when the container is unscrolled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OriginOffset {
    pub x: f64,
    pub y: f64,
}

impl OriginOffset {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Origin behind a side panel and a top bar, plus the surface border.
    pub fn from_chrome(
        side_panel_width: u32,
        top_bar_height: u32,
        border_x: u32,
        border_y: u32,
    ) -> Self {
        Self::new(
            f64::from(side_panel_width) + f64::from(border_x),
            f64::from(top_bar_height) + f64::from(border_y),
        )
    }
}

/// Maps client-space pointer positions onto natural-resolution image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoordinateMapper {
    origin: OriginOffset,
}

impl CoordinateMapper {
    pub const fn new(origin: OriginOffset) -> Self {
        Self { origin }
    }

    pub const fn origin(&self) -> OriginOffset {
        self.origin
    }

    /// Out-of-surface positions are passed through unclamped.
    pub fn to_pixel(&self, event: &PointerEvent, scroll: ScrollOffset) -> Option<PixelPoint> {
        event
            .client_point()
            .map(|point| to_pixel(point, scroll, self.origin))
    }
}

pub fn to_pixel(point: ClientPoint, scroll: ScrollOffset, origin: OriginOffset) -> PixelPoint {
    let x = point.x + scroll.left - origin.x;
    let y = point.y + scroll.top - origin.y;
    PixelPoint::new(saturating_floor(x), saturating_floor(y))
}

fn saturating_floor(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    // `as` saturates at the i32 range.
    value.floor() as i32
}
