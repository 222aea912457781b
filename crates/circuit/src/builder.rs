//! Circuit construction: sampling a path of peers from the peer table.

use onionmesh_core::PeerDescriptor;
use onionmesh_discovery::PeerTable;
use rand::seq::SliceRandom;

/// Sample up to `hops` peers uniformly without replacement from `table`.
///
/// Returns fewer than `hops` if the table doesn't have enough peers, and an
/// empty circuit if the table is empty.
pub fn build_random(table: &PeerTable, hops: usize) -> Vec<PeerDescriptor> {
    let mut peers = table.all();
    peers.shuffle(&mut rand::thread_rng());
    peers.truncate(hops);
    peers
}

/// Build a circuit ending exactly at `target`, with `hops - 1` intermediaries
/// sampled uniformly without replacement from the remaining peers.
///
/// If fewer than `hops - 1` other peers exist, the circuit is shortened
/// rather than repeating a peer — a peer may then serve as both relay and
/// exit, which is a known, accepted weakness (see project documentation).
pub fn build_targeted(table: &PeerTable, target: &PeerDescriptor, hops: usize) -> Vec<PeerDescriptor> {
    let target_id = target.id();
    let mut others: Vec<PeerDescriptor> = table.all().into_iter().filter(|p| p.id() != target_id).collect();
    others.shuffle(&mut rand::thread_rng());

    let intermediaries_wanted = hops.saturating_sub(1);
    others.truncate(intermediaries_wanted);

    others.push(target.clone());
    others
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(n: u16) -> PeerDescriptor {
        PeerDescriptor::new("10.0.0.1", n, format!("PEM{n}"))
    }

    #[test]
    fn empty_table_yields_empty_circuit() {
        let table = PeerTable::new();
        assert!(build_random(&table, 3).is_empty());
    }

    #[test]
    fn random_circuit_capped_at_available_peers() {
        let table = PeerTable::new();
        table.insert(peer(6000));
        table.insert(peer(6001));
        let circuit = build_random(&table, 5);
        assert_eq!(circuit.len(), 2);
    }

    #[test]
    fn targeted_circuit_ends_at_target() {
        let table = PeerTable::new();
        table.insert(peer(6000));
        table.insert(peer(6001));
        table.insert(peer(6002));
        let target = peer(6002);
        let circuit = build_targeted(&table, &target, 3);
        assert_eq!(circuit.last(), Some(&target));
        assert_eq!(circuit.len(), 3);
    }

    #[test]
    fn targeted_circuit_shortens_when_peers_scarce() {
        let table = PeerTable::new();
        table.insert(peer(6000));
        let target = peer(6000);
        let circuit = build_targeted(&table, &target, 3);
        assert_eq!(circuit, vec![target]);
    }

    #[test]
    fn targeted_circuit_never_repeats_a_non_target_peer() {
        let table = PeerTable::new();
        table.insert(peer(6000));
        table.insert(peer(6001));
        let target = peer(6001);
        let circuit = build_targeted(&table, &target, 3);
        let unique: std::collections::HashSet<_> = circuit.iter().map(PeerDescriptor::id).collect();
        assert_eq!(unique.len(), circuit.len());
    }
}
