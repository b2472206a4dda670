//! Static office geometry and topology
//!
//! Rooms, doors, the shared corridor band and the named waypoint pools agents
//! walk between. Everything here is immutable lookup data built once by
//! [`Layout::standard`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Continuous 2-D point in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Length of this point taken as a vector
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Axis-aligned rectangle, half-open on its far edges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub w: f64,
    /// Height
    pub h: f64,
}

impl Rect {
    /// Create a new rectangle
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Whether the point lies inside the rectangle
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }

    /// Center point
    pub fn center(&self) -> Point {
        Point::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }
}

/// Room identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomId {
    /// Conference room (meetings)
    Conference,
    /// CEO office
    Ceo,
    /// Kitchen (coffee)
    Kitchen,
    /// Engineering room
    Code,
    /// Marketing room
    Mkt,
    /// Operations room
    Ops,
    /// Trading room
    Trd,
    /// Lounge (sofa and ping-pong table)
    Lounge,
}

/// A door is three waypoints: just inside, on the threshold, and on the
/// corridor center line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Door {
    /// Approach point inside the room
    pub inside: Point,
    /// The door itself
    pub at: Point,
    /// Corridor-side anchor
    pub corridor: Point,
}

/// A room of the office
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    /// Identifier
    pub id: RoomId,
    /// Floor rectangle
    pub rect: Rect,
    /// Single door onto the corridor
    pub door: Door,
    /// Agent whose desk lives here, if any
    pub home: Option<&'static str>,
}

impl Room {
    /// Desk position for the room's home agent
    pub fn desk(&self) -> Point {
        Point::new(
            self.rect.x + self.rect.w * 0.5,
            self.rect.y + self.rect.h * 0.6,
        )
    }
}

/// Reservation zone: a named group of mutually exclusive spots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Kitchen coffee spots
    Kitchen,
    /// Lounge sofa seats
    Lounge,
    /// Game-table sides, laid out as facing pairs `(2k, 2k + 1)`
    Game,
    /// Conference seats
    Meeting,
}

impl Zone {
    /// Room the zone lives in
    pub fn room(&self) -> RoomId {
        match self {
            Zone::Kitchen => RoomId::Kitchen,
            Zone::Lounge | Zone::Game => RoomId::Lounge,
            Zone::Meeting => RoomId::Conference,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Zone::Kitchen => "kitchen",
            Zone::Lounge => "lounge",
            Zone::Game => "game",
            Zone::Meeting => "meeting",
        };
        f.write_str(name)
    }
}

const CORRIDOR_Y: f64 = 236.0;
const DOOR_DEPTH: f64 = 24.0;

/// Complete static topology of the office
#[derive(Debug, Clone)]
pub struct Layout {
    rooms: Vec<Room>,
    corridor_band: Rect,
    corridor_nodes: Vec<Point>,
    kitchen: Vec<Point>,
    lounge: Vec<Point>,
    game: Vec<Point>,
    meeting: Vec<Point>,
}

impl Layout {
    /// The standard eight-room floor plan.
    pub fn standard() -> Self {
        let rooms = vec![
            top_room(RoomId::Conference, Rect::new(16.0, 16.0, 232.0, 182.0), None),
            top_room(RoomId::Ceo, Rect::new(264.0, 16.0, 292.0, 202.0), Some("main")),
            top_room(RoomId::Kitchen, Rect::new(572.0, 16.0, 224.0, 182.0), None),
            bottom_room(RoomId::Code, Rect::new(16.0, 258.0, 232.0, 196.0), Some("coder")),
            bottom_room(RoomId::Mkt, Rect::new(264.0, 258.0, 232.0, 196.0), Some("marketer")),
            bottom_room(RoomId::Ops, Rect::new(512.0, 258.0, 232.0, 196.0), Some("daily")),
            bottom_room(RoomId::Trd, Rect::new(760.0, 258.0, 232.0, 196.0), Some("kalshi")),
            Room {
                id: RoomId::Lounge,
                rect: Rect::new(1016.0, 16.0, 248.0, 480.0),
                door: Door {
                    inside: Point::new(1016.0 + DOOR_DEPTH, CORRIDOR_Y),
                    at: Point::new(1016.0, CORRIDOR_Y),
                    corridor: Point::new(1016.0 - DOOR_DEPTH, CORRIDOR_Y),
                },
                home: None,
            },
        ];

        let corridor_nodes = (0..20)
            .map(|i| Point::new(40.0 + 50.0 * i as f64, CORRIDOR_Y))
            .collect();

        let conference_center = Point::new(132.0, 16.0 + 182.0 * 0.58);
        let meeting = [
            (-80.0, 0.0),
            (80.0, 0.0),
            (-46.0, -52.0),
            (46.0, -52.0),
            (-46.0, 52.0),
            (46.0, 52.0),
        ]
        .iter()
        .map(|&(dx, dy)| conference_center + Point::new(dx, dy))
        .collect();

        Self {
            rooms,
            // Overlaps the bottom strip of the CEO office.
            corridor_band: Rect::new(0.0, 214.0, 1016.0, 42.0),
            corridor_nodes,
            kitchen: vec![
                Point::new(640.0, 110.0),
                Point::new(690.0, 110.0),
                Point::new(740.0, 110.0),
                Point::new(665.0, 160.0),
                Point::new(715.0, 160.0),
            ],
            lounge: vec![
                Point::new(1060.0, 64.0),
                Point::new(1110.0, 64.0),
                Point::new(1160.0, 64.0),
                Point::new(1210.0, 64.0),
                Point::new(1090.0, 130.0),
                Point::new(1190.0, 130.0),
            ],
            game: vec![
                Point::new(1140.0, 164.0),
                Point::new(1140.0, 288.0),
                Point::new(1030.0, 226.0),
                Point::new(1250.0, 226.0),
            ],
            meeting,
        }
    }

    /// All rooms
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Look up a room by id
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// Corridor waypoints, ordered west to east
    pub fn corridor_nodes(&self) -> &[Point] {
        &self.corridor_nodes
    }

    /// Room containing the point. Points in the corridor band belong to no room.
    pub fn room_at(&self, p: Point) -> Option<&Room> {
        if self.corridor_band.contains(p) {
            return None;
        }
        self.rooms.iter().find(|r| r.rect.contains(p))
    }

    /// Home room of an agent
    pub fn home_of(&self, agent_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.home == Some(agent_id))
    }

    /// Desk position of an agent; agents without a room get a corridor-side default.
    pub fn desk_of(&self, agent_id: &str) -> Point {
        self.home_of(agent_id)
            .map(Room::desk)
            .unwrap_or(Point::new(500.0, 360.0))
    }

    /// Candidate spots of a reservation zone
    pub fn pool(&self, zone: Zone) -> &[Point] {
        match zone {
            Zone::Kitchen => &self.kitchen,
            Zone::Lounge => &self.lounge,
            Zone::Game => &self.game,
            Zone::Meeting => &self.meeting,
        }
    }

    /// Unreserved fallback point for a zone whose spots are all taken
    pub fn fallback(&self, zone: Zone) -> Point {
        let pool = self.pool(zone);
        if pool.is_empty() {
            return self
                .room(zone.room())
                .map(|r| r.rect.center())
                .unwrap_or_default();
        }
        let sum = pool.iter().fold(Point::default(), |acc, p| acc + *p);
        sum * (1.0 / pool.len() as f64)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::standard()
    }
}

fn top_room(id: RoomId, rect: Rect, home: Option<&'static str>) -> Room {
    let cx = rect.x + rect.w * 0.5;
    let bottom = rect.y + rect.h;
    Room {
        id,
        rect,
        door: Door {
            inside: Point::new(cx, bottom - DOOR_DEPTH),
            at: Point::new(cx, bottom),
            corridor: Point::new(cx, CORRIDOR_Y),
        },
        home,
    }
}

fn bottom_room(id: RoomId, rect: Rect, home: Option<&'static str>) -> Room {
    let cx = rect.x + rect.w * 0.5;
    Room {
        id,
        rect,
        door: Door {
            inside: Point::new(cx, rect.y + DOOR_DEPTH),
            at: Point::new(cx, rect.y),
            corridor: Point::new(cx, CORRIDOR_Y),
        },
        home,
    }
}
