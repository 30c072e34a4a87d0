#![allow(non_snake_case)]
#![allow(unused_parens)]

use indexheap::{IndexedPQ, QuadHashTable};

// shortest distances from node 0, relaxing edges with decrease
fn main1() {
  let names = ["larz","mary","narx","oarw","nev","haten"];
  let edges:[&[(usize,u32)];6] = [
    &[(1,7),(2,9),(5,14)],
    &[(2,10),(3,15)],
    &[(3,11),(5,2)],
    &[(4,6)],
    &[],
    &[(4,9)],
  ];
  let mut dist = [u32::MAX; 6];
  let mut pq = IndexedPQ::with_degree(3, names.len());
  dist[0] = 0;
  if let Err(e) = pq.insert(0, 0) { println!("insert failed: {}", e); }
  while let Some((u,d)) = pq.poll() {
    println!("settled {}: {}", names[u], d);
    for &(v,w) in edges[u] {
      let nd = d + w;
      if dist[v] == u32::MAX {
        dist[v] = nd;
        if let Err(e) = pq.insert(v, nd) { println!("insert failed: {}", e); }
      }
      else if pq.decrease(v, nd) {
        dist[v] = nd;
      }
    }//for
  }//while
  println!("poll on empty: {:?}", pq.poll_min_key_index());
  println!("contains(9): {:?}", pq.contains(9));
}//main1

fn main2() {
  let mut gpa:QuadHashTable<&'static str, u16> = QuadHashTable::with_capacity(8, 0.65);
  for (n,g) in [("larz",245),("mary",375),("narx",108),("sam",399),("oarw",390)] {
    gpa.insert(n,g);
  }
  println!("capacity {}, used buckets {}", gpa.capacity(), gpa.used_buckets());
  println!("remove(larz): {:?}", gpa.remove(&"larz"));
  println!("insert(mary): {:?}", gpa.insert("mary",301));
  gpa.insert("nev",145);
  gpa.insert("haten",101);
  println!("capacity {}, used buckets {}", gpa.capacity(), gpa.used_buckets());
  for n in ["mary","larz","narx","oarw","nev","haten","sam"] {
    println!("{}: {:?}", n, gpa.get(&n));
  }
  for (k,v) in gpa.iter() { println!("key {}, value {}", k, v); }
}//main2

fn main() {
  main1();
  println!("\n-------------");
  main2();
}
