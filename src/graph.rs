use crate::{
    point::Point,
    room::{closest_open_nodes, corridor, Room},
    shape::hallway,
    symmetric_map::SymmetricMap,
};

use fnv::FnvHashSet;
use petgraph::{
    algo::tarjan_scc,
    dot::{Config, Dot},
    stable_graph::StableGraph,
    unionfind::UnionFind,
    Undirected,
};
use rand::Rng;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Connects every room to room 0 with as little corridor as the greedy order allows.
///
/// Rooms before `first_new` must already be connected to each other through `links`. Candidate
/// pairs (nearest nodes, Manhattan distance) go into a min-heap; the cheapest pair joining two
/// different components gets a corridor, which is appended to `rooms` as a room of its own and
/// linked to both ends. Distances from each new corridor to every other component are pushed back
/// into the heap, so later corridors may branch off earlier ones. `organic` roughens corridors
/// with cave-style growth.
///
/// Cells failing `open` cannot be written. Pairs whose nodes or straight path touch such cells
/// only get used once no other pair can join their components.
///
/// Returns the indices of the appended corridors.
pub fn connect_rooms(
    rooms: &mut Vec<Room>,
    links: &mut SymmetricMap<i32>,
    first_new: usize,
    organic: bool,
    open: impl Fn(&Point) -> bool,
    rng: &mut impl Rng,
) -> Vec<usize> {
    let num_rooms = rooms.len();
    if num_rooms <= 1 {
        return Vec::new();
    }

    // Each corridor merges two components, so at most `num_rooms - 1` get appended.
    let mut sets = UnionFind::<usize>::new(2 * num_rooms - 1);
    for (i, j, _) in links.iter() {
        sets.union(i, j);
    }
    let mut components = (0..num_rooms)
        .map(|i| sets.find_mut(i))
        .collect::<FnvHashSet<_>>()
        .len();

    let mut candidates = BinaryHeap::new();
    for j in first_new..num_rooms {
        for i in 0..j {
            if !sets.equiv(i, j) {
                let (blocked, _, _, d) = closest_open_nodes(&rooms[i], &rooms[j], &open);
                candidates.push(Reverse((blocked, d, i, j)));
            }
        }
    }
    log::debug!(
        "Connecting {} components with {} candidate pairs",
        components,
        candidates.len()
    );

    let mut corridors = Vec::new();
    while components > 1 {
        let Reverse((blocked, _, i, j)) = candidates
            .pop()
            .expect("Ran out of corridor candidates before every room was connected");
        if sets.equiv(i, j) {
            continue;
        }

        let (_, from, to, d) = closest_open_nodes(&rooms[i], &rooms[j], &open);
        if !blocked && !hallway(from, to).iter().all(|p| open(p)) {
            candidates.push(Reverse((true, d, i, j)));
            continue;
        }
        let k = rooms.len();
        rooms.push(corridor(from, to, organic, rng));
        sets.union(i, k);
        sets.union(j, k);
        links.insert(i, k, d);
        links.insert(k, j, d);
        corridors.push(k);
        components -= 1;
        log::trace!("Corridor {} joins rooms {} and {} ({} cells)", k, i, j, d);

        for m in 0..k {
            if !sets.equiv(k, m) {
                let (blocked, _, _, d) = closest_open_nodes(&rooms[m], &rooms[k], &open);
                candidates.push(Reverse((blocked, d, m, k)));
            }
        }
    }

    if log::log_enabled!(log::Level::Debug) {
        let graph = room_graph(rooms.len(), links);
        log::debug!(
            "Room graph = {:?}",
            Dot::with_config(&graph, &[Config::EdgeNoLabel])
        );
    }

    corridors
}

/// Graph with one node per room and one edge per link, weighted by corridor length.
pub fn room_graph(
    num_rooms: usize,
    links: &SymmetricMap<i32>,
) -> StableGraph<usize, i32, Undirected> {
    let mut graph = StableGraph::default();
    let nodes: Vec<_> = (0..num_rooms).map(|i| graph.add_node(i)).collect();
    for (i, j, d) in links.iter() {
        if i < num_rooms && j < num_rooms {
            graph.add_edge(nodes[i], nodes[j], *d);
        }
    }

    graph
}

pub fn is_connected<N, E>(graph: &StableGraph<N, E, Undirected>) -> bool {
    tarjan_scc(graph).len() <= 1
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝
