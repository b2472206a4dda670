//! Door-and-corridor routing
//!
//! Rooms are strung along one corridor, so a route is a fixed chain: leave
//! through the current room's door, follow the corridor nodes, enter through
//! the destination's door.

use super::geometry::{Layout, Point, Room};

/// Consecutive waypoints closer than this are collapsed into one.
pub const ROUTE_EPSILON: f64 = 1.0;

/// Build the ordered waypoint list from `from` to `to`.
///
/// Same-room and corridor-to-corridor trips are a single hop. Trips that cross
/// a room boundary pass through exactly one door triple per boundary crossed.
pub fn build_route(layout: &Layout, from: Point, to: Point) -> Vec<Point> {
    let from_room = layout.room_at(from);
    let to_room = layout.room_at(to);

    let mut raw = Vec::new();
    if same_room(from_room, to_room) {
        raw.push(to);
    } else {
        let exit_anchor = match from_room {
            Some(room) => {
                raw.extend([room.door.inside, room.door.at, room.door.corridor]);
                room.door.corridor
            }
            None => from,
        };
        let entry_anchor = to_room.map(|room| room.door.corridor).unwrap_or(to);

        raw.extend(corridor_walk(layout.corridor_nodes(), exit_anchor, entry_anchor));

        if let Some(room) = to_room {
            raw.extend([room.door.corridor, room.door.at, room.door.inside]);
        }
        raw.push(to);
    }

    collapse(from, raw)
}

fn same_room(a: Option<&Room>, b: Option<&Room>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.id == b.id,
        (None, None) => true,
        _ => false,
    }
}

/// Corridor nodes from the one nearest `start` to the one nearest `end`,
/// walked by index so the traversal never doubles back. Nodes that overshoot
/// either anchor are trimmed.
fn corridor_walk(nodes: &[Point], start: Point, end: Point) -> Vec<Point> {
    let (Some(i), Some(j)) = (nearest_index(nodes, start), nearest_index(nodes, end)) else {
        return Vec::new();
    };
    let walk: Vec<Point> = if i <= j {
        nodes[i..=j].to_vec()
    } else {
        nodes[j..=i].iter().rev().copied().collect()
    };

    let heading = end - start;
    walk.into_iter()
        .filter(|p| dot(*p - start, heading) > 0.0 && dot(*p - end, heading) < 0.0)
        .collect()
}

fn dot(a: Point, b: Point) -> f64 {
    a.x * b.x + a.y * b.y
}

fn nearest_index(nodes: &[Point], p: Point) -> Option<usize> {
    nodes
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.distance(p).total_cmp(&b.distance(p)))
        .map(|(i, _)| i)
}

fn collapse(from: Point, raw: Vec<Point>) -> Vec<Point> {
    let mut route: Vec<Point> = Vec::with_capacity(raw.len());
    let mut last = from;
    for p in raw {
        if p.distance(last) < ROUTE_EPSILON {
            continue;
        }
        route.push(p);
        last = p;
    }
    route
}
