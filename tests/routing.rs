//! Property tests for door-and-corridor routing

use cubicle::office::geometry::{Layout, Point, Room};
use cubicle::office::router::{ROUTE_EPSILON, build_route};
use proptest::prelude::*;

/// A point inside `room`, as fractions of its rectangle
fn point_in(room: &Room, u: f64, v: f64) -> Point {
    Point::new(room.rect.x + room.rect.w * u, room.rect.y + room.rect.h * v)
}

fn clear_of_door(room: &Room, p: Point) -> bool {
    p.distance(room.door.inside) > 2.0 && p.distance(room.door.at) > 2.0
}

proptest! {
    #[test]
    fn prop_route_ends_at_destination(
        a in 0usize..8,
        b in 0usize..8,
        u1 in 0.05f64..0.95,
        v1 in 0.05f64..0.95,
        u2 in 0.05f64..0.95,
        v2 in 0.05f64..0.95,
    ) {
        let layout = Layout::standard();
        let from_room = &layout.rooms()[a];
        let to_room = &layout.rooms()[b];
        let from = point_in(from_room, u1, v1);
        let to = point_in(to_room, u2, v2);
        prop_assume!(layout.room_at(from).map(|r| r.id) == Some(from_room.id));
        prop_assume!(layout.room_at(to).map(|r| r.id) == Some(to_room.id));
        prop_assume!(from.distance(to) > ROUTE_EPSILON);
        prop_assume!(clear_of_door(from_room, from) && clear_of_door(to_room, to));

        let route = build_route(&layout, from, to);
        prop_assert_eq!(route.last().copied(), Some(to));

        let mut last = from;
        for p in &route {
            prop_assert!(p.distance(last) >= ROUTE_EPSILON);
            last = *p;
        }

        if a == b {
            prop_assert_eq!(route.len(), 1);
        } else {
            let exit = route.iter().position(|p| *p == from_room.door.at);
            let entry = route.iter().rposition(|p| *p == to_room.door.at);
            prop_assert!(exit.is_some() && entry.is_some());
            let (exit, entry) = (exit.unwrap(), entry.unwrap());
            prop_assert!(exit < entry);
            prop_assert_eq!(route[exit - 1], from_room.door.inside);
            prop_assert_eq!(route[entry + 1], to_room.door.inside);

            // Exactly one door triple per boundary crossed.
            let doors = route
                .iter()
                .filter(|p| layout.rooms().iter().any(|r| r.door.at == **p))
                .count();
            prop_assert_eq!(doors, 2);
        }
    }

    #[test]
    fn prop_corridor_walk_never_doubles_back(a in 0usize..8, b in 0usize..8) {
        prop_assume!(a != b);
        let layout = Layout::standard();
        let from = layout.rooms()[a].rect.center();
        let to = layout.rooms()[b].rect.center();
        prop_assume!(layout.room_at(from).is_some() && layout.room_at(to).is_some());

        let route = build_route(&layout, from, to);
        let xs: Vec<f64> = route
            .iter()
            .filter(|p| p.y == 236.0)
            .map(|p| p.x)
            .collect();
        let ascending = xs.windows(2).all(|w| w[0] <= w[1]);
        let descending = xs.windows(2).all(|w| w[0] >= w[1]);
        prop_assert!(ascending || descending, "corridor xs {:?}", xs);
    }
}
